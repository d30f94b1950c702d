use rollcall::setup_logging;

#[test]
fn debug_and_info_setup_can_both_run() {
    // The first call installs the subscriber; the second finds it in place.
    setup_logging(true);
    setup_logging(false);

    tracing::info!(run_id = "abc", "logging is live");
}
