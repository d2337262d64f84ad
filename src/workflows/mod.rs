pub mod scope2;
