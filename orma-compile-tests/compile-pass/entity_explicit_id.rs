use orma::prelude::*;

#[derive(Default, Entity)]
#[entity(query(name = "by_name", sql = "SELECT {readspec} FROM {table} WHERE `name`=:name"))]
#[entity(query(name = "rename", sql = "UPDATE {table} SET `name`=:name WHERE {keyspec}"))]
pub struct AccountHolder {
    #[entity(id)]
    pub holder_id: i64,
    pub name: String,
    pub opened: chrono::NaiveDate,
}

fn main() {
    let schema = AccountHolder::schema();
    assert_eq!(schema.table, "account_holder");
    assert_eq!(schema.key, "account_holder_id");
    assert_eq!(schema.queries.len(), 2);

    let mut holder = AccountHolder::default();
    holder.set_id(4);
    assert_eq!(holder.holder_id, 4);
}
