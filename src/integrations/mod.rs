pub mod software_provider;
