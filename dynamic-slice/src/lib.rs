pub use dslice_core::{architecture, backend, config, error, eval, export, hooks, seed, slice};

pub mod slicer {
    pub use dslice_core::slicer::*;
}

pub mod instruction {
    pub use dslice_core::instruction::*;
    pub use dslice_core::operand::*;
}

pub mod semantics {
    pub use dslice_core::resolver::size_keyword;
    pub use dslice_core::semantics::*;
}

pub mod prelude {
    pub use dslice_core::prelude::*;
}

#[cfg(feature = "plugins")]
pub mod plugins {
    pub use dslice_abrt as abrt;

    use dslice_core::hooks::HookRegistry;

    /// Register every bundled plugin with `hooks`.
    pub fn register_all(hooks: &mut HookRegistry) {
        abrt::register(hooks);
    }
}
