pub mod directory_user;
