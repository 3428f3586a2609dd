use orma::prelude::*;

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "widget", key = "widget_id")]
pub struct Widget {
    pub id: i64,
    pub a_date: i64,
    pub mess: String,
    pub note: Option<String>,
    #[entity(manual)]
    pub created_at: i64,
    #[entity(skip)]
    pub dirty: bool,
}

fn main() {
    let schema = Widget::schema();
    assert_eq!(schema.table, "widget");
    assert_eq!(schema.properties, &["a_date", "mess", "note", "created_at"]);
    assert_eq!(schema.manual, &["created_at"]);
    assert!(!Widget::default().is_saved());
}
