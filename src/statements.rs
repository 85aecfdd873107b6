//! SQL templates for the session table.
//!
//! Table and column names come from configuration, so statements are rendered
//! once per store with the identifiers quoted for the target dialect. Values
//! are never part of the SQL text; every template uses placeholders that are
//! bound when a [`Statement`] is built.

use sea_orm::{DbBackend, Statement, Value};

use crate::config::ColumnNames;

/// Alias given to `COUNT(*)` in the count templates.
pub(crate) const COUNT_ALIAS: &str = "total";

/// Which side of the expiry boundary a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expiry {
    /// `expires >= now`
    Live,
    /// `expires < now`
    Expired,
}

/// Pre-rendered statements for one table.
#[derive(Debug, Clone)]
pub(crate) struct SqlTemplates {
    backend: DbBackend,
    /// Params: session id, now.
    pub get: String,
    /// Params: now.
    pub select_live: String,
    pub select_expired: String,
    pub count_live: String,
    pub count_expired: String,
    pub delete_expired: String,
    /// No params.
    pub truncate: String,
    /// Params: session id.
    pub delete_by_id: String,
    /// Params: user.
    pub delete_by_user: String,
    /// Params: session id, expires, data, user.
    pub insert_ignore: String,
    /// Params: data, expires, session id.
    pub update_by_id: String,
    /// Params: data, expires, user, session id.
    pub update_with_user_by_id: String,
    /// No params.
    pub create_table: String,
}

impl SqlTemplates {
    pub fn new(backend: DbBackend, table: &str, columns: &ColumnNames) -> Self {
        let q = |ident: &str| quote(backend, ident);
        let p = |n: usize| placeholder(backend, n);

        let table = q(table);
        let id = q(&columns.session_id);
        let expires = q(&columns.expires);
        let data = q(&columns.data);
        let user = q(&columns.user);

        let columns_list = format!("{id}, {expires}, {data}, {user}");
        let count = q(COUNT_ALIAS);
        let now = p(1);

        let select_where = |cmp: &str| {
            format!("SELECT {columns_list} FROM {table} WHERE {expires} {cmp} {now}")
        };
        let count_where = |cmp: &str| {
            format!("SELECT COUNT(*) AS {count} FROM {table} WHERE {expires} {cmp} {now}")
        };

        let values_list = format!("{}, {}, {}, {}", p(1), p(2), p(3), p(4));
        let insert_into = format!("INTO {table} ({columns_list}) VALUES ({values_list})");
        let insert_ignore = match backend {
            DbBackend::MySql => format!("INSERT IGNORE {insert_into}"),
            DbBackend::Postgres => format!("INSERT {insert_into} ON CONFLICT ({id}) DO NOTHING"),
            DbBackend::Sqlite => format!("INSERT OR IGNORE {insert_into}"),
        };

        let truncate = match backend {
            DbBackend::Sqlite => format!("DELETE FROM {table}"),
            DbBackend::MySql | DbBackend::Postgres => format!("TRUNCATE TABLE {table}"),
        };

        let data_type = match backend {
            DbBackend::MySql => "mediumtext",
            DbBackend::Postgres | DbBackend::Sqlite => "text",
        };
        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             {id} varchar(128) primary key not null, \
             {expires} bigint not null, \
             {data} {data_type} not null, \
             {user} varchar(255) not null)"
        );

        Self {
            backend,
            get: format!(
                "SELECT {data} FROM {table} WHERE {id} = {} AND {expires} >= {}",
                p(1),
                p(2)
            ),
            select_live: select_where(">="),
            select_expired: select_where("<"),
            count_live: count_where(">="),
            count_expired: count_where("<"),
            delete_expired: format!("DELETE FROM {table} WHERE {expires} < {}", p(1)),
            truncate,
            delete_by_id: format!("DELETE FROM {table} WHERE {id} = {}", p(1)),
            delete_by_user: format!("DELETE FROM {table} WHERE {user} = {}", p(1)),
            insert_ignore,
            update_by_id: format!(
                "UPDATE {table} SET {data} = {}, {expires} = {} WHERE {id} = {}",
                p(1),
                p(2),
                p(3)
            ),
            update_with_user_by_id: format!(
                "UPDATE {table} SET {data} = {}, {expires} = {}, {user} = {} WHERE {id} = {}",
                p(1),
                p(2),
                p(3),
                p(4)
            ),
            create_table,
        }
    }

    pub fn select(&self, expiry: Expiry) -> &str {
        match expiry {
            Expiry::Live => &self.select_live,
            Expiry::Expired => &self.select_expired,
        }
    }

    pub fn count(&self, expiry: Expiry) -> &str {
        match expiry {
            Expiry::Live => &self.count_live,
            Expiry::Expired => &self.count_expired,
        }
    }

    /// Binds `values` to `sql` for this dialect.
    pub fn statement<I>(&self, sql: &str, values: I) -> Statement
    where
        I: IntoIterator<Item = Value>,
    {
        Statement::from_sql_and_values(self.backend, sql, values)
    }
}

fn quote(backend: DbBackend, ident: &str) -> String {
    let mark = match backend {
        DbBackend::MySql => '`',
        DbBackend::Postgres | DbBackend::Sqlite => '"',
    };
    let escaped = ident.replace(mark, &format!("{mark}{mark}"));
    format!("{mark}{escaped}{mark}")
}

fn placeholder(backend: DbBackend, n: usize) -> String {
    match backend {
        DbBackend::Postgres => format!("${n}"),
        DbBackend::MySql | DbBackend::Sqlite => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates(backend: DbBackend) -> SqlTemplates {
        SqlTemplates::new(backend, "SESSIONS", &ColumnNames::default())
    }

    #[test]
    fn mysql_templates() {
        let sql = templates(DbBackend::MySql);

        assert_eq!(
            sql.get,
            "SELECT `DATA` FROM `SESSIONS` WHERE `SESSION_ID` = ? AND `EXPIRES` >= ?"
        );
        assert_eq!(
            sql.insert_ignore,
            "INSERT IGNORE INTO `SESSIONS` (`SESSION_ID`, `EXPIRES`, `DATA`, `USER`) VALUES (?, ?, ?, ?)"
        );
        assert_eq!(sql.truncate, "TRUNCATE TABLE `SESSIONS`");
        assert_eq!(
            sql.create_table,
            "CREATE TABLE IF NOT EXISTS `SESSIONS` (`SESSION_ID` varchar(128) primary key not null, \
             `EXPIRES` bigint not null, `DATA` mediumtext not null, `USER` varchar(255) not null)"
        );
    }

    #[test]
    fn postgres_templates_number_placeholders() {
        let sql = templates(DbBackend::Postgres);

        assert_eq!(
            sql.update_by_id,
            r#"UPDATE "SESSIONS" SET "DATA" = $1, "EXPIRES" = $2 WHERE "SESSION_ID" = $3"#
        );
        assert_eq!(
            sql.update_with_user_by_id,
            r#"UPDATE "SESSIONS" SET "DATA" = $1, "EXPIRES" = $2, "USER" = $3 WHERE "SESSION_ID" = $4"#
        );
        assert_eq!(
            sql.insert_ignore,
            r#"INSERT INTO "SESSIONS" ("SESSION_ID", "EXPIRES", "DATA", "USER") VALUES ($1, $2, $3, $4) ON CONFLICT ("SESSION_ID") DO NOTHING"#
        );
        assert_eq!(
            sql.count(Expiry::Expired),
            r#"SELECT COUNT(*) AS "total" FROM "SESSIONS" WHERE "EXPIRES" < $1"#
        );
    }

    #[test]
    fn sqlite_has_no_truncate() {
        let sql = templates(DbBackend::Sqlite);

        assert_eq!(sql.truncate, r#"DELETE FROM "SESSIONS""#);
        assert!(sql.insert_ignore.starts_with("INSERT OR IGNORE INTO"));
        assert_eq!(
            sql.select(Expiry::Live),
            r#"SELECT "SESSION_ID", "EXPIRES", "DATA", "USER" FROM "SESSIONS" WHERE "EXPIRES" >= ?"#
        );
    }

    #[test]
    fn identifiers_are_escaped() {
        let columns = ColumnNames {
            session_id: "id`; DROP TABLE x; --".into(),
            ..ColumnNames::default()
        };
        let sql = SqlTemplates::new(DbBackend::MySql, "s", &columns);

        assert_eq!(
            sql.delete_by_id,
            "DELETE FROM `s` WHERE `id``; DROP TABLE x; --` = ?"
        );
    }
}
