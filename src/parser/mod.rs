pub mod source_page;
