//! 数据传输对象模块

pub mod search_dto;
