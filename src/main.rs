fn main() -> anyhow::Result<()> {
    floor_viewer::run()
}
