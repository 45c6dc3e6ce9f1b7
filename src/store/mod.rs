pub(crate) mod table;

pub(crate) use table::EntryTable;
