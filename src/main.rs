fn main() -> anyhow::Result<()> {
    imagenet_feeder::run_cli()
}
