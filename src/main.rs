use anyhow::Context;

fn main() -> anyhow::Result<()> {
    polydraw::run().context("polydraw session failed")
}
