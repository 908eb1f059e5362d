pub mod dispatcher;
pub mod synchronizer;
