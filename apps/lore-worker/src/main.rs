use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = lore_worker::Args::parse();
	lore_worker::run(args).await
}
