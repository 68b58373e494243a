pub mod runloop;
