#[derive(Debug, PartialEq)]
pub(crate) struct ShellOptions {
    pub(crate) verbose: bool,
    pub(crate) emit_prompt: bool,
    pub(crate) action: ShellAction,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            emit_prompt: true,
            action: ShellAction::Run,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum ShellAction {
    Help,
    Run,
}

type OptionSetter = fn(&mut ShellOptions);

struct ShellOption {
    short: char,
    long: &'static str,
    set: OptionSetter,
}

pub(crate) const USAGE_MSG: &str = "\
Usage: shell [-hvp]
   -h   print this message
   -v   print additional diagnostic information
   -p   do not emit a command prompt";

impl ShellOptions {
    const SHELL_OPTIONS: &'static [ShellOption] = &[
        ShellOption {
            short: 'h',
            long: "help",
            set: |options| options.action = ShellAction::Help,
        },
        ShellOption {
            short: 'v',
            long: "verbose",
            set: |options| options.verbose = true,
        },
        ShellOption {
            short: 'p',
            long: "no-prompt",
            set: |options| options.emit_prompt = false,
        },
    ];

    pub(crate) fn from_env() -> Result<ShellOptions, String> {
        let args = std::env::args().collect();

        Self::parse_arguments(args)
    }

    /// parse the shell's arguments into a ShellOptions struct
    pub(crate) fn parse_arguments(arguments: Vec<String>) -> Result<ShellOptions, String> {
        let mut options = ShellOptions::default();

        for arg in arguments.into_iter().skip(1) {
            if let Some(name) = arg.strip_prefix("--") {
                let option = Self::SHELL_OPTIONS
                    .iter()
                    .find(|o| o.long == name)
                    .ok_or_else(|| format!("unrecognized option '{arg}'"))?;
                (option.set)(&mut options);
            } else if let Some(flags) = arg.strip_prefix('-') {
                // flags can be grouped, so we loop over the characters
                for char in flags.chars() {
                    let option = Self::SHELL_OPTIONS
                        .iter()
                        .find(|o| o.short == char)
                        .ok_or_else(|| format!("invalid option -- '{char}'"))?;
                    (option.set)(&mut options);
                }
            } else {
                Err(format!("unexpected argument '{arg}'"))?;
            }
        }

        Ok(options)
    }
}
