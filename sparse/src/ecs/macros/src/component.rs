use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitInt, parse_macro_input};

pub fn derive_component(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    // Get the struct name we are annotating
    let struct_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let mut consts = Vec::new();
    for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident("component")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("in_place") {
                consts.push(quote! { const IN_PLACE_DELETE: bool = true; });
                Ok(())
            } else if meta.path.is_ident("pinned") {
                consts.push(quote! { const PINNED: bool = true; });
                Ok(())
            } else if meta.path.is_ident("page_size") {
                let value: LitInt = meta.value()?.parse()?;
                consts.push(quote! { const PAGE_SIZE: usize = #value; });
                Ok(())
            } else {
                Err(meta.error("expected `in_place`, `pinned` or `page_size = N`"))
            }
        });

        if let Err(err) = parsed {
            return err.to_compile_error().into();
        }
    }

    // Use ::rusty_sparse::ecs::Component which works both inside and outside the crate.
    // Inside the crate, this works because of `extern crate self as rusty_sparse;` in lib.rs
    // Outside the crate, this naturally resolves to the rusty_sparse dependency.
    TokenStream::from(quote! {
        impl #impl_generics ::rusty_sparse::ecs::Component for #struct_name #ty_generics #where_clause {
            #(#consts)*
        }
    })
}
