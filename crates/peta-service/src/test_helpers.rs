use crate::database::MIGRATIONS;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::MigrationHarness;

pub fn establish_test_connection() -> SqliteConnection {
    let mut connection =
        SqliteConnection::establish(":memory:").expect("Failed to create in-memory database");

    connection
        .run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    connection
}

pub mod test_utils {
    use super::*;
    use crate::models::NewApproval;
    use crate::schema::approvals;

    pub fn count_approvals(conn: &mut SqliteConnection) -> i64 {
        approvals::table
            .count()
            .get_result(conn)
            .expect("Failed to count approvals")
    }

    pub fn insert_approval(conn: &mut SqliteConnection, approval: &NewApproval) {
        diesel::insert_into(approvals::table)
            .values(approval)
            .execute(conn)
            .expect("Failed to insert approval");
    }
}
