mod batch_tests;
mod orchestrator_tests;
mod router_tests;
mod utils;
