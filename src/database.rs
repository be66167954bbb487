use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{ffi, Connection};
use tokio::sync::Mutex;

use crate::time_utils::TIME_FORMAT;
use crate::{models, Error, Result};

const SCHEMA : &str = "
CREATE TABLE IF NOT EXISTS users (
    id       INTEGER PRIMARY KEY,
    name     TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    created  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS links (
    id      INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id),
    title   TEXT NOT NULL,
    address TEXT NOT NULL,
    created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
";

fn error_code_match(
    err : &rusqlite::Error,
    code : ffi::ErrorCode,
    ext : i64,
) -> bool {
    matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == code
                && i64::from(e.extended_code) == ext)
}

macro_rules! db_method {
        ($name:ident (
            &$self:ident,
            $conn:ident
            $(, $pname:ident : $ptype:ty)*
        ) -> $ret:ty $body:block ) => {
            pub async fn $name (&$self, $( $pname : $ptype, )* ) -> $ret {
                let $conn = $self.conn.lock().await;
                tokio::task::block_in_place(|| $body)
            }
        }
    }

pub struct Db {
    conn : Mutex<Connection>,
}

impl Db {
    pub fn new<P : AsRef<std::path::Path>>(p : P) -> Result<Self> {
        Self::with_conn(Connection::open(p)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_conn(Connection::open_in_memory()?)
    }

    fn with_conn(conn : Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn : Mutex::new(conn),
        })
    }

    db_method! {insert_user(
        &self,
        conn,
        name : &str,
        password : &str
    ) -> Result<i64> {
        conn
            .prepare_cached("INSERT INTO users (name, password) VALUES (?, ?)")?
            .execute(rusqlite::params![name, password])
            .map_err(|err| {
                if error_code_match(
                    &err,
                    ffi::ErrorCode::ConstraintViolation,
                    2067
                ) {
                    Error::DuplicateUsername(name.to_string())
                } else {
                    err.into()
                }
            })?;

        Ok(conn.last_insert_rowid())
    }}

    db_method! {get_user_by_name(
        &self,
        conn,
        username : &str
    ) -> Result<models::User> {
        let mut stmt = conn
            .prepare_cached("SELECT * FROM users WHERE users.name = ?")?;

        let mut rows = stmt.query(rusqlite::params![username])?;

        let row = rows.next()?
            .ok_or(Error::UserNameNotFound(username.to_string()))?;

        Ok(row_parse(row)?)
    }}

    db_method! {insert_link(
        &self,
        conn,
        user_id : i64,
        title : &str,
        address : &str
    ) -> Result<i64> {
        conn
            .prepare_cached(
                "INSERT INTO links (user_id, title, address) VALUES (?, ?, ?)",
            )?
            .execute(rusqlite::params![user_id, title, address])?;

        Ok(conn.last_insert_rowid())
    }}

    db_method! {get_links(
        &self,
        conn
    ) -> Result<Vec<(models::Link, models::User)>> {
        let mut stmt = conn.prepare_cached(
            "SELECT links.*, users.* FROM links \
             JOIN users ON users.id = links.user_id \
             ORDER BY links.id",
        )?;

        let mut rows = stmt.query([])?;

        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(row_parse::<(models::Link, models::User)>(row)?);
        }

        Ok(links)
    }}
}

struct Row<'a> {
    off :   usize,
    inner : &'a rusqlite::Row<'a>,
    cols :  Vec<&'a str>,
}

impl<'a> From<&'a rusqlite::Row<'a>> for Row<'a> {
    fn from(r : &'a rusqlite::Row<'a>) -> Row<'a> {
        Row {
            off :   0,
            cols :  r.as_ref().column_names(),
            inner : r,
        }
    }
}

fn row_parse<'a, T : FromRow>(row : &'a rusqlite::Row<'a>) -> Result<T> {
    T::from_row(&mut row.into())
}

impl<'a> Row<'a> {
    // only the columns not yet consumed by an earlier FromRow, so joined
    // tables can repeat column names
    fn column_names(&self) -> &[&'a str] {
        &self.cols[self.off..]
    }

    fn get<T : FromSql>(&self, idx : usize) -> rusqlite::Result<T> {
        self.inner.get(idx + self.off)
    }

    fn advance(&mut self, n : usize) {
        self.off += n;
    }
}

trait FromRow: Sized {
    fn column_count() -> usize;
    fn from_row(row : &mut Row) -> Result<Self>;
}

impl<T, U> FromRow for (T, U)
where
    T : FromRow,
    U : FromRow,
{
    fn column_count() -> usize {
        T::column_count() + U::column_count()
    }

    fn from_row(row : &mut Row) -> Result<Self> {
        let t = T::from_row(row)?;
        row.advance(T::column_count());
        let u = U::from_row(row)?;

        Ok((t, u))
    }
}

macro_rules! impl_from_row {
        ($table:ident, $ty:ty { $($field:ident),* }) => {

            impl FromRow for $ty {
                fn column_count() -> usize {
                    const N : usize = [
                        $(
                            stringify!($field),
                        )*
                    ].len();

                    N
                }

                fn from_row(row : &mut Row) -> Result<$ty> {
                    fn find(slc : &[&str], s : &str) -> Option<usize> {
                        for (i, v) in slc.iter().enumerate() {
                            if v == &s {
                                return Some(i)
                            }
                        }

                        None
                    }

                    let cols = row.column_names();

                    let m = &[
                        $(
                            find(cols, stringify!($field)),
                        )*
                    ];

                    let mut it = m.iter().copied();

                    Ok(Self{
                    $(
                        $field : row.get(it.next().unwrap().unwrap())?,
                    )*
                    })
                }
            }
        }
    }

impl_from_row! {users, models::User {
    id, name, password, created
}}

impl_from_row! {links, models::Link {
    id, user_id, title, address, created
}}

impl FromSql for models::Time {
    fn column_result(value : ValueRef) -> FromSqlResult<models::Time> {
        let s : String = String::column_result(value)?;

        let dt = time::PrimitiveDateTime::parse(&s, &TIME_FORMAT)
            .map_err(|err| FromSqlError::Other(Box::new(err)))?;

        Ok(dt.assume_offset(time::UtcOffset::UTC).into())
    }
}
