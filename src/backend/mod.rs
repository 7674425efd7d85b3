pub mod kms;
