use super::logging;
use tracing::Level;

#[test]
fn logging_init_is_repeatable() {
    logging::init("info");
    logging::init("debug");
    logging::init("not-a-level");
}

#[test]
fn parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("WARN"), Level::WARN);
    assert_eq!(logging::parse_level(" trace "), Level::TRACE);
    assert_eq!(logging::parse_level("verbose"), Level::INFO);
    assert_eq!(logging::parse_level(""), Level::INFO);
}
