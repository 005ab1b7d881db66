fn main() -> anyhow::Result<()> {
    notetext_importer::run()
}
