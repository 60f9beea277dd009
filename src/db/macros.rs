//! Macro for convenient SQL statement construction.

/// Shorthand for a query with positional parameters.
///
/// ```ignore
/// use biograph_migrate::sql;
///
/// // Statement without parameters
/// let query = sql!(db, "SELECT COUNT(*) AS count FROM users");
///
/// // Parameters bind as $1, $2, ... in the order given
/// let query = sql!(
///     db,
///     "SELECT id FROM users WHERE phone_number = $1 OR old_user_id = $2",
///     phone,
///     old_id
/// );
///
/// let rows = query.fetch_all().await?;
/// ```
#[macro_export]
macro_rules! sql {
    // Statement without parameters
    ($db:expr, $sql:expr) => {
        $db.query($sql)
    };
    // Statement with positional parameters
    ($db:expr, $sql:expr, $($value:expr),+ $(,)?) => {
        $db.query($sql)$(.bind($value))+
    };
}
