mod mock_forwarder;

pub use mock_forwarder::MockForwarder;
