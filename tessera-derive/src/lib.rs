use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod descriptor;

/// Derive macro for the `Mapped` trait.
///
/// Generates `introspect()`, which describes the struct's persisted name and
/// properties together with accessor/mutator function pairs. For user types a
/// `Persistable` implementation is generated as well, so the type can be used
/// as a column or as a field of another user type.
///
/// The struct must have named fields and implement `Default`.
///
/// # Example
///
/// ```ignore
/// use tessera_core::Mapped;
///
/// #[derive(Default, Mapped)]
/// #[mapping(user_type = "address")]
/// struct Address {
///     zip: Option<String>,
///     city: Option<String>,
///     #[mapping(rename = "streetlines")]
///     street_lines: Vec<String>,
/// }
///
/// #[derive(Default, Mapped)]
/// struct AddressBook {
///     #[mapping(id)]
///     id: Option<String>,
///     currentaddress: Option<Address>,
/// }
/// ```
///
/// # Attributes
///
/// On the struct:
/// - `#[mapping(table = "name")]` - Table name (default: lowercase type name)
/// - `#[mapping(user_type)]` or `#[mapping(user_type = "name")]` - Map as a user type
/// - `#[mapping(crate = "path")]` - Path to `tessera_core` when re-exported
///
/// On fields:
/// - `#[mapping(id)]` - Part of the primary key
/// - `#[mapping(rename = "name")]` - Persisted name (default: lowercase field name)
/// - `#[mapping(skip)]` - Not persisted
#[proc_macro_derive(Mapped, attributes(mapping))]
pub fn derive_mapped(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match descriptor::derive_mapped_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// How the container is persisted.
pub(crate) enum Persisted {
    Table(String),
    UserType(String),
}

pub(crate) struct ContainerAttrs {
    pub persisted: Persisted,
    pub crate_path: syn::Path,
}

pub(crate) fn parse_container_attrs(input: &DeriveInput) -> syn::Result<ContainerAttrs> {
    let default_name = input.ident.to_string().to_lowercase();
    let mut table: Option<String> = None;
    let mut user_type: Option<String> = None;
    let mut crate_path: syn::Path = syn::parse_quote!(::tessera_core);

    for attr in &input.attrs {
        if !attr.path().is_ident("mapping") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: syn::LitStr = meta.value()?.parse()?;
                table = Some(value.value());
            } else if meta.path.is_ident("user_type") {
                user_type = Some(if meta.input.peek(syn::Token![=]) {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    value.value()
                } else {
                    default_name.clone()
                });
            } else if meta.path.is_ident("crate") {
                let value: syn::LitStr = meta.value()?.parse()?;
                crate_path = value.parse()?;
            } else {
                return Err(meta.error("unsupported mapping attribute"));
            }
            Ok(())
        })?;
    }

    let persisted = match (table, user_type) {
        (Some(_), Some(_)) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "a type cannot be both a table and a user type",
            ));
        }
        (_, Some(name)) => Persisted::UserType(name),
        (Some(name), None) => Persisted::Table(name),
        (None, None) => Persisted::Table(default_name),
    };

    Ok(ContainerAttrs {
        persisted,
        crate_path,
    })
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub id: bool,
    pub skip: bool,
    pub rename: Option<String>,
}

pub(crate) fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("mapping") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                result.id = true;
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else {
                return Err(meta.error("unsupported mapping attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}
