use flow_ar::{config::ArConfig, flow};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ArConfig::load(path)?,
        None => ArConfig::default(),
    };
    flow::run(config)
}
