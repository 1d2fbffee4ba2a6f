pub(crate) mod db_restore; // mongorestore invocations for either end of a transfer
