pub mod json_array_store;
