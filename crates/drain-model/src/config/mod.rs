mod error;
pub use error::ConfigError;

mod policy;
pub use policy::AdmissionPolicy;

mod run;
pub use run::RunConfig;
