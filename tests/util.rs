//! Shared test utilities for integration tests
//!
//! A small header/implementation pair whose definitions are out of
//! layout order, plus the expected result under the default rules.

#![allow(dead_code)]

use assert_fs::prelude::*;

pub const HEADER: &str = r#"#pragma once
#include <string>

namespace ui {

class Widget {
public:
    Widget();
    ~Widget();
    static Widget* create(const std::string& name);
    void draw(int x, int y) const;

protected:
    virtual void onResize(int w, int h);

private:
    void layout();
    static int counter_;
};

int clamp(int value, int lo = 0, int hi = 100);

}
"#;

pub const SOURCE: &str = r#"#include "widget.h"

namespace ui {

int clamp(int v, int lo, int hi) {
    return v < lo ? lo : (v > hi ? hi : v);
}

// Lays out children.
void Widget::layout() {
}

/* Draws the widget
   at a position. */
void Widget::draw(int x, int y) const {
    (void)x;
    (void)y;
}

Widget* Widget::create(const std::string& name) {
    return new Widget();
}

static void debugDump() {
}

Widget::Widget() {
}

void Widget::onResize(int w, int h) {
}

Widget::~Widget() {
}

}
"#;

/// SOURCE under the default rules with the hoist gap policy
pub const SORTED: &str = r#"#include "widget.h"

namespace ui {

Widget::Widget() {
}

Widget::~Widget() {
}

Widget* Widget::create(const std::string& name) {
    return new Widget();
}

/* Draws the widget
   at a position. */
void Widget::draw(int x, int y) const {
    (void)x;
    (void)y;
}

void Widget::onResize(int w, int h) {
}

// Lays out children.
void Widget::layout() {
}

int clamp(int v, int lo, int hi) {
    return v < lo ? lo : (v > hi ? hi : v);
}

static void debugDump() {
}

}
"#;

/// Temp dir with `widget.h` and `widget.cpp`
pub fn make_widget_fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("widget.h")
        .write_str(HEADER)
        .expect("write header");
    tmp.child("widget.cpp")
        .write_str(SOURCE)
        .expect("write source");

    tmp
}
