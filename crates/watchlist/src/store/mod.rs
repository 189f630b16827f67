pub mod source_table;
