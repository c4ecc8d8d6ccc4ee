pub mod orchard;
