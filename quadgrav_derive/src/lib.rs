/// Derive macro generating an implementation of the trait `Body`.
///
/// The struct must have fields named `position`, `velocity` and `mass`. The position and
/// velocity fields must be `glam::DVec2` and the mass field `f64`.
#[proc_macro_derive(Body)]
pub fn body_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse(input);

    impl_body(ast)
        .unwrap_or_else(|e| syn::Error::to_compile_error(&e))
        .into()
}

fn impl_body(input: syn::Result<syn::DeriveInput>) -> syn::Result<proc_macro2::TokenStream> {
    let input = input?;

    let data_struct = match &input.data {
        syn::Data::Struct(data_struct) => Ok(data_struct),
        syn::Data::Enum(enum_data) => Err(syn::Error::new_spanned(
            enum_data.enum_token,
            "the `Body` trait can only be derived for struct types",
        )),
        syn::Data::Union(union_data) => Err(syn::Error::new_spanned(
            union_data.union_token,
            "the `Body` trait can only be derived for struct types",
        )),
    }?;

    let position_ty = &require_field("position", data_struct)?.ty;
    let velocity_ty = &require_field("velocity", data_struct)?.ty;
    let mass_ty = &require_field("mass", data_struct)?.ty;

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = &input.ident;

    Ok(quote::quote! {
        impl #impl_generics Body for #name #ty_generics #where_clause {
            #[inline]
            fn position(&self) -> #position_ty {
                self.position
            }

            #[inline]
            fn velocity(&self) -> #velocity_ty {
                self.velocity
            }

            #[inline]
            fn mass(&self) -> #mass_ty {
                self.mass
            }

            #[inline]
            fn position_mut(&mut self) -> &mut #position_ty {
                &mut self.position
            }

            #[inline]
            fn velocity_mut(&mut self) -> &mut #velocity_ty {
                &mut self.velocity
            }
        }
    })
}

fn get_field<'a>(field_name: &str, data_struct: &'a syn::DataStruct) -> Option<&'a syn::Field> {
    data_struct
        .fields
        .iter()
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == field_name))
}

fn require_field<'a>(
    field_name: &str,
    data_struct: &'a syn::DataStruct,
) -> syn::Result<&'a syn::Field> {
    get_field(field_name, data_struct).ok_or_else(|| {
        syn::Error::new_spanned(&data_struct.fields, format!("no `{field_name}` field"))
    })
}
