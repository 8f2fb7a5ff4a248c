fn main() -> anyhow::Result<()> {
    respiro_lib::run()
}
