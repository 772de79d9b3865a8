use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = msearch_api::Args::parse();

	msearch_api::run(args).await
}
