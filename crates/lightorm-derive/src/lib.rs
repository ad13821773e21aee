//! Derive macros for lightorm
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive the `Entity` descriptor for a struct holding an `EntityState`.
///
/// # Example
///
/// ```ignore
/// use lightorm::{Entity, EntityState};
///
/// #[derive(Entity)]
/// #[orm(table = "users", primary_key = "id", columns = "id, username, level")]
/// struct User {
///     state: EntityState,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(columns = "a, b, c")]` - Declared columns (required)
/// - `#[orm(table = "name")]` - Table name (default: snake_case struct name)
/// - `#[orm(primary_key = "name")]` - Primary-key column (default: `id`)
/// - `#[orm(state)]` on a field - The `EntityState` field; may be omitted
///   when the struct has a single field. Other fields start from `Default`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
