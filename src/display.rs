use anyhow::Result;
use serde::Serialize;

use crate::types::user::User;

pub fn display_json<T: Serialize>(o: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&o)?);
    Ok(())
}

pub fn display_users(users: &[User]) {
    if users.is_empty() {
        println!("<empty list>");
        return;
    }
    println!("{:<20} {:<16} UPDATE", "NAME", "LOGIN");
    for user in users {
        println!("{}", user.display_row());
    }
}
