use std::{sync::Arc, time::Duration};

use bridge_relayer::{
    BridgeScanner, BridgeScannerBuilder,
    test_utils::{MockEventSource, RecordingDispatcher},
};

pub const POLLING_INTERVAL: Duration = Duration::from_secs(15);

pub type MockScanner = BridgeScanner<Arc<MockEventSource>, Arc<RecordingDispatcher>>;

pub fn setup_scanner(
    source: MockEventSource,
    dispatcher: RecordingDispatcher,
) -> (MockScanner, Arc<MockEventSource>, Arc<RecordingDispatcher>) {
    setup_scanner_with(BridgeScannerBuilder::new(), source, dispatcher)
}

pub fn setup_scanner_with(
    builder: BridgeScannerBuilder,
    source: MockEventSource,
    dispatcher: RecordingDispatcher,
) -> (MockScanner, Arc<MockEventSource>, Arc<RecordingDispatcher>) {
    let source = Arc::new(source);
    let dispatcher = Arc::new(dispatcher);
    let scanner = builder
        .polling_interval(POLLING_INTERVAL)
        .build(Arc::clone(&source), Arc::clone(&dispatcher))
        .expect("valid scanner configuration");
    (scanner, source, dispatcher)
}
