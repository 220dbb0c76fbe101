mod decode_field;
mod decode_model;

use decode_model::decode_model;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Implements `trove::Model` for a struct with named fields.
///
/// Struct attribute: `#[trove(table = "...")]`, the table defaults to the struct name.
/// Field attributes: `primary_key`, `autoincrement`, `unique`, `unique = "group"`,
/// `default = <literal>`, `not_null`, `name = "column"`, `ignore` and `parent`.
/// The struct must implement `Default`, fields that are not `pub` are kept out of the table.
#[proc_macro_derive(Model, attributes(trove))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    let metadata = match decode_model(&item) {
        Ok(v) => v,
        Err(e) => return e.to_compile_error().into(),
    };
    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let table = &metadata.table;
    let register = metadata.columns.iter().map(|c| {
        let column = &c.name;
        let kind = &c.kind;
        let mut modifiers = Vec::new();
        if c.primary_key {
            let autoincrement = c.autoincrement;
            modifiers.push(quote!(.primary_key(#autoincrement)));
        }
        if c.not_null {
            modifiers.push(quote!(.not_null()));
        }
        if let Some(default) = &c.default {
            modifiers.push(quote!(.default_value(#default)));
        }
        for group in &c.unique {
            modifiers.push(quote!(.unique(#group)));
        }
        if c.private {
            modifiers.push(quote!(.private()));
        }
        quote! {
            builder.field(::trove::FieldDescriptor::new(#column, #kind) #(#modifiers)*);
        }
    });
    let inherit = metadata.parents.iter().map(|(_, ty)| {
        quote! {
            ::trove::DescriptorBuilder::inherit::<#ty>(builder);
        }
    });
    let get_arms = metadata.columns.iter().map(|c| {
        let column = &c.name;
        let ident = &c.ident;
        quote!(#column => Some(::trove::AsValue::as_value(&self.#ident)),)
    });
    let get_parents = metadata.parents.iter().map(|(ident, _)| {
        quote! {
            if let Some(value) = ::trove::Model::field(&self.#ident, name) {
                return Some(value);
            }
        }
    });
    let set_arms = metadata.columns.iter().map(|c| {
        let column = &c.name;
        let ident = &c.ident;
        quote! {
            #column => {
                self.#ident = ::trove::AsValue::try_from_value(value)?;
                Ok(())
            }
        }
    });
    let set_parents = metadata.parents.iter().map(|(ident, _)| {
        quote! {
            if ::trove::Model::field(&self.#ident, name).is_some() {
                return ::trove::Model::set_field(&mut self.#ident, name, value);
            }
        }
    });
    quote! {
        impl #impl_generics ::trove::Model for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;

            fn register(builder: &mut ::trove::DescriptorBuilder) {
                #(#register)*
                #(#inherit)*
            }

            fn instantiate() -> ::trove::Result<Self> {
                Ok(<Self as ::std::default::Default>::default())
            }

            fn field(&self, name: &str) -> ::std::option::Option<::trove::Value> {
                match name {
                    #(#get_arms)*
                    _ => {
                        #(#get_parents)*
                        None
                    }
                }
            }

            fn set_field(&mut self, name: &str, value: ::trove::Value) -> ::trove::Result<()> {
                match name {
                    #(#set_arms)*
                    _ => {
                        #(#set_parents)*
                        Err(::trove::OrmError::NoSuchField {
                            model: stringify!(#name).into(),
                            field: name.into(),
                        }
                        .into())
                    }
                }
            }
        }
    }
    .into()
}
