//! Reference substitution used by the `shim` and `replace` directives

use crate::decls::DeclarationSet;
use crate::elem::Elem;
use log::debug;

/// Replace every reference to `id` inside every declaration with a copy of
/// `replacement`. With `register`, `replacement` is also installed as the
/// declaration of `id`.
pub fn substitute(decls: &mut DeclarationSet, id: &str, replacement: &Elem, register: bool) -> usize {
    let mut replaced = 0;
    for (name, elem) in decls.iter_mut() {
        let n = elem.replace_refs(id, replacement);
        if n > 0 {
            debug!("{}: replaced {} reference(s) to {}", name, n, id);
        }
        replaced += n;
    }
    if register {
        decls.insert(id, replacement.clone());
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elem::{Field, Primitive};

    #[test]
    fn test_substitute_and_register() {
        let mut decls = DeclarationSet::new();
        decls.insert(
            "Wallet",
            Elem::structure(vec![
                Field::new(0, "Gold", Elem::ident("Money")),
                Field::new(1, "History", Elem::map(Elem::ident("Money"), Elem::ident("Money"))),
            ]),
        );

        let mut shim = Elem::primitive(Primitive::Int64);
        shim.set_alias("Money");
        let replaced = substitute(&mut decls, "Money", &shim, true);

        // the map key keeps its declared type
        assert_eq!(replaced, 2);
        assert_eq!(decls.get("Money"), Some(&shim));
    }

    #[test]
    fn test_substitute_without_register() {
        let mut decls = DeclarationSet::new();
        decls.insert("List", Elem::slice(Elem::ident("Old")));
        let replaced = substitute(&mut decls, "Old", &Elem::ident("uint8"), false);
        assert_eq!(replaced, 1);
        assert!(!decls.contains("Old"));
        assert_eq!(decls.get("List"), Some(&Elem::slice(Elem::ident("uint8"))));
    }
}
