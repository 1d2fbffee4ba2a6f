pub(crate) mod db_dump; // mongodump invocations for either end of a transfer
