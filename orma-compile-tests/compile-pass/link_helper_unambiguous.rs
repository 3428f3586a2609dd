#![deny(ambiguous_derive_helpers)]

use orma::prelude::*;

#[derive(Debug, Clone, Default, Entity)]
pub struct Author {
    pub id: i64,
}

#[derive(Debug, Clone, Default, Entity)]
pub struct Book {
    pub id: i64,
}

#[derive(Debug, Clone, Link)]
#[orma(table = "author_book")]
pub struct Authorship {
    #[orma(from)]
    pub author: Author,
    #[orma(to)]
    pub book: Book,
}

fn main() {
    let schema = Authorship::schema();
    assert_eq!(schema.table, "author_book");
    assert!(schema.properties.is_empty());
}
