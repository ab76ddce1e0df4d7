fn main() {
    tsh::tsh_main()
}
