pub type Time = crate::time_utils::Time;

#[derive(Debug)]
pub struct User {
    pub id :       i64,
    pub name :     String,
    pub password : String,
    pub created :  Time,
}

#[derive(Debug)]
pub struct Link {
    pub id :      i64,
    pub user_id : i64,
    pub title :   String,
    pub address : String,
    pub created : Time,
}
