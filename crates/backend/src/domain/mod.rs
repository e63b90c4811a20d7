pub mod a001_product;
