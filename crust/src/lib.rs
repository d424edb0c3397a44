mod check;
mod data;
mod error;
mod harness_configuration;
mod http_client;
mod load;
mod mock;
mod runner;
mod scenario;
mod util;

pub use check::json_subset;
pub use check::Check;
pub use check::CheckPolicy;
pub use check::CheckResult;
pub use check::Predicate;
pub use data::RequestData;
pub use data::ResponseData;
pub use error::Error;
pub use harness_configuration::HarnessConfiguration;
pub use http_client::HttpClient;
pub use http_client::HyperClient;
pub use load::LoadProfile;
pub use load::LoadRunner;
pub use load::LoadSummary;
pub use load::Stage;
pub use mock::MockRegistry;
pub use mock::RouteMock;
pub use runner::RunReport;
pub use runner::RunState;
pub use runner::Runner;
pub use runner::StepReport;
pub use scenario::Extract;
pub use scenario::Preflight;
pub use scenario::Scenario;
pub use scenario::Step;
pub use scenario::ThinkTime;
