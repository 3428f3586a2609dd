use orma::prelude::*;

#[derive(Debug, Clone, Default, Entity)]
pub struct User {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Entity)]
#[entity(table = "groups", key = "group_id")]
pub struct Group {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Link)]
#[orma(table = "user_group", order_from = "`joined` DESC", to_key = "grp_id")]
pub struct Membership {
    #[orma(from)]
    pub user: User,
    #[orma(to)]
    pub group: Group,
    #[orma(additional_key)]
    pub role: String,
    pub joined: i64,
}

fn main() {
    let schema = Membership::schema();
    assert_eq!(schema.properties, &["role", "joined"]);
    assert_eq!(schema.additional_key, &["role"]);
    assert_eq!(schema.to_key, Some("grp_id"));

    let link = Membership::assemble(User::default(), Group::default());
    assert_eq!(link.joined, 0);
    assert_eq!(link.from_entity().name, "");
}
