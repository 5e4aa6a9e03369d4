pub mod notifier;
pub mod persister;
