mod provider;
mod timer;

pub use provider::InjectedProvider;
pub use timer::GlooTimer;
