pub mod nml_file;
