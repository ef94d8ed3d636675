use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;
use syn::ext::IdentExt;

use crate::{ContainerAttrs, Persisted, parse_container_attrs, parse_field_attrs};

pub fn derive_mapped_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Mapped cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(named),
            ..
        }) => named,
        syn::Data::Struct(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Mapped can only be derived for structs with named fields",
            ));
        }
        syn::Data::Enum(_) | syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Mapped can only be derived for structs",
            ));
        }
    };

    let container = parse_container_attrs(input)?;
    let krate = &container.crate_path;

    let mut properties = Vec::new();
    for field in &fields.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            if attrs.id {
                return Err(syn::Error::new_spanned(
                    field,
                    "an identity property cannot be skipped",
                ));
            }
            continue;
        }
        properties.push(generate_property(field, attrs.rename, attrs.id, krate));
    }

    let introspect = generate_introspect(&container, &properties);
    let persistable = generate_persistable(name, &container);

    Ok(quote! {
        impl #krate::Mapped for #name {
            #introspect
        }

        #persistable
    })
}

fn generate_introspect(container: &ContainerAttrs, properties: &[TokenStream]) -> TokenStream {
    let krate = &container.crate_path;
    let start = match &container.persisted {
        Persisted::Table(name) => quote! { #krate::EntityDescriptor::table(#name) },
        Persisted::UserType(name) => quote! { #krate::EntityDescriptor::user_type(#name) },
    };

    quote! {
        fn introspect() -> ::core::result::Result<#krate::EntityDescriptor<Self>, #krate::MappingError> {
            #start
                #(.property(#properties))*
                .build()
        }
    }
}

/// Builds one `PropertyDescriptor` with non-capturing accessor closures.
fn generate_property(
    field: &syn::Field,
    rename: Option<String>,
    identity: bool,
    krate: &syn::Path,
) -> TokenStream {
    // Named fields always carry an ident
    let ident = field.ident.as_ref().expect("named field");
    let ty = &field.ty;
    let persisted = rename.unwrap_or_else(|| ident.unraw().to_string().to_lowercase());
    let identity = identity.then(|| quote! { .identity() });

    quote! {
        #krate::PropertyDescriptor::new(
            #persisted,
            <#ty as #krate::Persistable>::data_type(),
            |entity: &Self, codec: &#krate::ValueCodec| codec.write(&entity.#ident),
            |entity: &mut Self, value: #krate::TypedValue, codec: &#krate::ValueCodec| {
                entity.#ident = codec.read(value)?;
                ::core::result::Result::Ok(())
            },
        )
        #identity
    }
}

/// User types are column values themselves, routed through structural mapping.
fn generate_persistable(name: &syn::Ident, container: &ContainerAttrs) -> TokenStream {
    let Persisted::UserType(user_type) = &container.persisted else {
        return quote! {};
    };
    let krate = &container.crate_path;

    quote! {
        impl #krate::Persistable for #name {
            fn data_type() -> #krate::DataType {
                #krate::DataType::user_type(#user_type)
            }

            fn to_value(
                &self,
                codec: &#krate::ValueCodec,
            ) -> ::core::result::Result<#krate::TypedValue, #krate::MappingError> {
                codec.write_structure(self)
            }

            fn from_value(
                value: #krate::TypedValue,
                codec: &#krate::ValueCodec,
            ) -> ::core::result::Result<Self, #krate::MappingError> {
                codec.read_structure(value)
            }
        }
    }
}
