use crate::config::SessionConfig;
use crate::datapack::MemoryWriter;
use crate::placer::LinePlacer;
use crate::scope::BlockPos;
use crate::session::Session;

mod events;

fn config() -> SessionConfig {
    SessionConfig::new("ns", BlockPos::new(0, 64, 0))
}

fn session(config: &SessionConfig) -> Session<LinePlacer, MemoryWriter> {
    Session::new(config, LinePlacer::new(config.position), MemoryWriter::new()).unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
