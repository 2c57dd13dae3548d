mod component;

use proc_macro::TokenStream;

/// Derive `rusty_sparse::ecs::Component`.
///
/// Supported attributes, combinable in one `#[component(...)]` list:
/// - `in_place`: erase leaves a tombstone instead of moving the last value in.
/// - `pinned`: values are never relocated once emplaced (implies `in_place`).
/// - `page_size = N`: number of values per payload page, a power of two.
#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(item: TokenStream) -> TokenStream {
    component::derive_component(item)
}
